pub mod contact_repo;
pub use contact_repo::ContactRepository;
pub mod reference_repo;
pub use reference_repo::ReferenceRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod visit_repo;
pub use visit_repo::{VisitFilters, VisitRepository, VisitScope};
