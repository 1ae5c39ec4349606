pub mod accumulator;
pub mod acquisition_flow;

pub use accumulator::AcquireAccumulator;
pub use acquisition_flow::AcquisitionFlow;
