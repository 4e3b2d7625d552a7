pub mod block;
pub mod source;

pub use block::{DataBlock, InputBlock, Modality, OutputPacket, StreamHeader};
pub use source::{BlockSink, BlockSource, ChannelSource, WavFileSource};
