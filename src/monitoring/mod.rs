/*!
 * Monitoring
 * Hardware telemetry, load index and tracing setup
 */

mod lri;
mod snapshot;
mod telemetry;
mod tracer;

pub use snapshot::{
    CpuTopology, HardwareSnapshot, KernelReport, KernelSignal, KernelState, KernelTelemetry,
    LoadIndex, LoadState, NumaNode, NumaTopology,
};
pub use telemetry::{
    parse_cpu_list, read_numa_topology, sample_with_timeout, try_sample, StaticTelemetry,
    SystemTelemetry, TelemetryProvider,
};
pub use tracer::{init_tracing, TickSpan};
