use crate::analysis::LatencyTracker;
use forge_lim::Design;

/// The design being compiled along with the options and results that passes
/// share.
#[derive(Debug, Default)]
pub struct Context {
    pub design: Design,
    /// Pass options of the form `pass:opt=value`.
    pub extra_opts: Vec<String>,
    /// Filled in by the scheduling pass.
    pub latencies: Option<LatencyTracker>,
}

impl Context {
    pub fn new(design: Design) -> Self {
        Self {
            design,
            extra_opts: vec![],
            latencies: None,
        }
    }

    pub fn with_opts<I, S>(mut self, opts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_opts.extend(opts.into_iter().map(Into::into));
        self
    }
}
