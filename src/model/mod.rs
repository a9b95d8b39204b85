pub mod task;
pub mod user;

pub use task::{DayWindow, NewTask, Priority, Task, TaskFilter, TaskOrdering, TaskPatch};
pub use user::{NewUser, ProfilePatch, User};
