pub use super::authors::Entity as Authors;
pub use super::books::Entity as Books;
