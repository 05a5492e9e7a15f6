//! `unseen-formats` estimates a lower bound on the number of distinct digital file formats
//! by treating published format registries (PRONOM, fdd, GitHub Linguist, Wikidata, ...)
//! as independent samples of an unknown population and applying a species accumulation
//! curve, with file extensions standing in for species.
//!
//! The pipeline is a straight line of pure functions:
//! [`source`] loads registries → [`accumulation::accumulate`] builds the accumulation
//! table → [`fit::fit_accumulation`] fits `y = a·ln(x) + b` and extrapolates.
//!
//! ```
//! use unseen_formats::{accumulate, fit_curve, ExtensionSet, FitDomain, RegistryCollection};
//!
//! let registries: RegistryCollection = [
//!     ("A", ["a", "b", "c"].iter().collect::<ExtensionSet>()),
//!     ("B", ["b", "c", "d", "e"].iter().collect::<ExtensionSet>()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let table = accumulate(&registries)?;
//! assert_eq!(table.total_exts(), vec![4, 7]);
//! assert_eq!(table.total_uniq_exts(), vec![4, 5]);
//!
//! let domain = FitDomain::new(2, 50)?;
//! let fit = fit_curve(&table.total_exts(), &table.total_uniq_exts(), domain, 100, 1.96)?;
//! assert!((fit.a * 7f64.ln() + fit.b - 5.0).abs() < 1e-9);
//! # Ok::<(), unseen_formats::Error>(())
//! ```
pub mod accumulation;
pub mod compare;
pub mod config;
pub mod error;
pub mod extension;
pub mod fit;
pub mod registry;
pub mod report;
pub mod source;

pub use accumulation::{accumulate, AccumulationRow, AccumulationTable};
pub use config::{AnalysisConfig, FitConfig};
pub use error::{Error, Result};
pub use fit::{fit_accumulation, fit_curve, FitDomain, FitPoint, FitResult, LogFit, LogModel};
pub use registry::{ExtensionSet, RegistryCollection};
pub use source::{load_path, SourceFormat};
