pub mod dataset;
pub mod embedding;
pub mod metrics;
pub mod train_model;
pub mod triplet_loss;

pub use dataset::{load_labelled_images, Triplets};
pub use embedding::{EmbeddingConfig, EmbeddingModel};
pub use train_model::{BestTau, History, TrainModel, TrainOptions, TripletNetwork};
pub use triplet_loss::TripletLoss;
