mod packet;
mod plan;
mod runner;

pub use packet::{ComputePacket, PacketError};
pub use plan::{plan, PacketPlan};
pub use runner::{run_packets, RunnerError};
