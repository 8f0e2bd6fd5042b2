//! Garden placement engine.
//!
//! Plants a rectangular garden from a finite inventory of circular
//! plants, one simulation-scored placement at a time: a diverse starter
//! group, copies of its pattern, further groups in the open space and a
//! greedy fill. `fill_json` takes a JSON `FillParams` document and
//! returns a JSON `FillResult`; with the `python` feature the same call
//! is exported to Python.

pub mod cache;
pub mod candidates;
pub mod collision;
pub mod error;
pub mod evaluate;
pub mod fill;
pub mod garden;
pub mod group;
pub mod growth;
pub mod heuristic;
pub mod inventory;
pub mod pipeline;
pub mod prng;
pub mod replicate;
pub mod scheduler;
pub mod types;
pub mod validate;

pub use error::{FillError, OracleError};
pub use fill::{fill, fill_garden};
pub use types::{FillConfig, FillParams, FillResult};

/// Run the fill engine on a JSON parameter document.
pub fn fill_json(params_json: &str) -> Result<String, FillError> {
    let params: FillParams = serde_json::from_str(params_json)?;
    let result = fill(&params)?;
    Ok(serde_json::to_string(&result)?)
}

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    /// Takes a JSON `FillParams` string and returns a JSON `FillResult`.
    #[pyfunction]
    fn fill_json(params_json: &str) -> PyResult<String> {
        super::fill_json(params_json).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string())
        })
    }

    #[pymodule]
    fn garden_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(fill_json, m)?)?;
        Ok(())
    }
}
