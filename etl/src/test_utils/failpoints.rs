use fail::FailScenario;

/// Failpoints configured for the duration of a test.
///
/// Every configured point is switched off again when the scenario is dropped. Failpoints are
/// global to the process, so tests using them run in their own test binary.
pub struct PipelineFailScenario<'a> {
    _scenario: FailScenario<'a>,
    configured: Vec<&'static str>,
}

impl<'a> PipelineFailScenario<'a> {
    pub fn setup() -> PipelineFailScenario<'a> {
        Self {
            _scenario: FailScenario::setup(),
            configured: Vec::new(),
        }
    }

    /// Makes `failpoint` return an error every time it is evaluated.
    pub fn fail(self, failpoint: &'static str) -> Self {
        self.configure(failpoint, "return")
    }

    /// Sets `failpoint` to a `fail` crate action such as `"1*return->off"`.
    pub fn configure(mut self, failpoint: &'static str, action: &str) -> Self {
        fail::cfg(failpoint, action).unwrap();
        self.configured.push(failpoint);

        self
    }
}

impl Drop for PipelineFailScenario<'_> {
    fn drop(&mut self) {
        for failpoint in &self.configured {
            fail::cfg(*failpoint, "off").unwrap();
        }
    }
}
