use std::time::Duration;

/// Knobs for the driving loop.  Intervals count CPU instructions.
#[derive(Clone, Debug)]
pub struct Config {
    /// Step the RSP every this many instructions (while it is running).
    pub rsp_interval:       u32,
    /// Drain the RDP command buffer every this many instructions.
    pub rdp_interval:       u32,
    /// Refresh the framebuffer and pace the loop every this many instructions.
    pub pace_interval:      u32,
    pub pace_sleep:         Duration,
    /// Without pacing, the loop runs as fast as the host allows.
    pub pacing:             bool,
    pub icache:             bool,
    /// Log every executed instruction at trace level.
    pub trace_instructions: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            rsp_interval:       5,
            rdp_interval:       100,
            pace_interval:      1000,
            pace_sleep:         Duration::from_millis(16),
            pacing:             true,
            icache:             true,
            trace_instructions: false,
        }
    }
}
