use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// Triggered after every dimension has been loaded and before the new watermark is inserted.
pub const PIPELINE_BEFORE_WATERMARK_INSERT: &str = "pipeline.before_watermark_insert";

/// Triggered after the new watermark is inserted and before the fact rows are appended.
pub const PIPELINE_BEFORE_FACT_INSERT: &str = "pipeline.before_fact_insert";

/// Evaluates the failpoint `name`, returning an error when it is configured to fire.
pub fn etl_fail_point(name: &str) -> EtlResult<()> {
    fail_point!(name, |_| {
        bail!(
            ErrorKind::InjectedFailure,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}
