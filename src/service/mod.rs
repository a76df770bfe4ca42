mod crud;
mod mapper;

pub use crud::{CrudService, LIST_PAGE_SIZE};
pub use mapper::{RecordMapper, UnimplementedMapper};
