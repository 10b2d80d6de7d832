pub mod engine;
pub mod service;
pub mod template;

pub use engine::AuditEngine;
pub use service::AuditService;
pub use template::{fill_template, ChecklistTemplate, Placeholders};
