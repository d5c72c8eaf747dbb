pub mod account;
pub mod health;
pub mod message;
pub mod todo;

pub use account::{
    Account, ChangePasswordRequest, LoginRequest, Profile, RegisterRequest, UpdateProfileRequest,
};
pub use health::{HealthEntry, HealthEntryRequest};
pub use message::{
    DailyMessage, MessageActionRequest, MessageReadMark, MessageView, NewMessageRequest,
};
pub use todo::{NewTodoRequest, PostponeData, Todo, UpdateTodoRequest};
