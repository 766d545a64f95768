pub mod augment;
pub mod etl;
pub mod face_verification;
pub mod pipeline;
pub mod starships;

pub use crate::domain::model::{Page, Starship, TransformResult};
pub use crate::domain::ports::{ConfigProvider, PageSource, Pipeline, Storage};
pub use crate::utils::error::Result;
