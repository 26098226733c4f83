use skyindex::{IdError, PixelError};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::generator::GeneratorError;
use crate::io::PersistError;
use crate::maskbits::MaskbitsError;
use crate::merge::MergeError;
use crate::table::TableError;
use crate::templates::TemplateError;

/// Any failure of the mock pipeline
#[derive(Debug, Error)]
pub enum MockError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Maskbits(#[from] MaskbitsError),

    #[error(transparent)]
    Pixel(#[from] PixelError),

    #[error(transparent)]
    Id(#[from] IdError),
}

impl MockError {
    /// Whether the failure comes from missing or invalid setup rather than
    /// from the data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MockError::Config(_)
                | MockError::Catalog(CatalogError::Configuration(_))
                | MockError::Generator(GeneratorError::Catalog(CatalogError::Configuration(_)))
        )
    }
}
