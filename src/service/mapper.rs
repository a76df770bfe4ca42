use crate::core::{CrudError, Result};

/// Conversion hooks between stored records `R` and external representations `D`.
///
/// Every hook fails with [`CrudError::NotImplemented`] unless overridden, so
/// a mapper only implements the directions its service actually uses.
pub trait RecordMapper<D, R>: Send + Sync + 'static {
    fn map_to_external(&self, _record: &R) -> Result<D> {
        Err(CrudError::NotImplemented("Mapping to DTO not implemented"))
    }

    /// Builds a full replacement record from `external`.
    fn map_to_stored(&self, _external: &D) -> Result<R> {
        Err(CrudError::NotImplemented("Mapping to Entity not implemented"))
    }

    /// Applies the fields present in `external` onto `record` in place.
    fn patch_stored_from_external(&self, _record: &mut R, _external: &D) -> Result<()> {
        Err(CrudError::NotImplemented(
            "Patching to Entity not implemented",
        ))
    }
}

/// Mapper with no overridden hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedMapper;

impl<D, R> RecordMapper<D, R> for UnimplementedMapper {}
