mod health;
mod tasks;

pub use health::health_handler;
pub use tasks::{create_task_handler, get_task_handler, list_tasks_handler};
