mod test_signals;

use approx::assert_abs_diff_eq;

use fastfilter::config::ConfigDelta;
use fastfilter::transport::{Modality, OutputPacket, WavFileSource};
use fastfilter::{FastFilter, StreamCapture, save_wav};

use test_signals::*;

fn temp_wav(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("fastfilter_{}_{}.wav", name, std::process::id()))
}

#[test]
fn test_mono_wav_through_engine() {
    let path = temp_wav("mono");
    let input = two_tone(3000);
    save_wav(&path, &input, 1, 8000).unwrap();

    let taps = sinc(0.2, 101);
    let engine = FastFilter::new();
    engine
        .apply_configuration_change(&ConfigDelta {
            manual_real_taps: Some(taps.clone()),
            ..Default::default()
        })
        .unwrap();

    let mut source = WavFileSource::new(&path, "mono", 512).unwrap();
    assert_eq!(source.sample_rate(), 8000);
    let mut packets: Vec<OutputPacket> = Vec::new();
    engine.run(&mut source, &mut packets).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(headers(&packets), vec![Modality::Real]);
    match packets.last() {
        Some(OutputPacket::Data(d)) => assert!(d.end_of_stream),
        other => panic!("expected final data packet, got {:?}", other),
    }
    assert_eq!(engine.stream_count(), 0);

    let capture = StreamCapture::from_packets(&packets, "mono");
    assert_eq!(capture.frames(), input.len());
    let expected = direct_convolution(&to_complex(&input), &to_complex(&taps));
    for (got, want) in capture.samples.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*got, want.re, epsilon = 1e-3);
    }
}

#[test]
fn test_stereo_wav_is_complex_stream() {
    let path = temp_wav("stereo");
    let input = two_tone(1000);
    save_wav(&path, &mux_zeros(&input), 2, 8000).unwrap();

    let engine = FastFilter::new();
    engine
        .apply_configuration_change(&ConfigDelta {
            manual_real_taps: Some(vec![0.5]),
            ..Default::default()
        })
        .unwrap();

    let mut source = WavFileSource::new(&path, "iq", 300).unwrap();
    let mut packets: Vec<OutputPacket> = Vec::new();
    engine.run(&mut source, &mut packets).unwrap();
    std::fs::remove_file(&path).ok();

    let capture = StreamCapture::from_packets(&packets, "iq");
    assert_eq!(capture.modality, Modality::Complex);
    assert_eq!(capture.frames(), input.len());

    let (re, im) = demux(&capture.samples);
    for (got, want) in re.iter().zip(input.iter()) {
        assert_abs_diff_eq!(*got, 0.5 * want, epsilon = 1e-4);
    }
    assert!(im.iter().all(|x| x.abs() < 1e-4));
}
