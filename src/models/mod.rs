//! Classifiers and model construction

pub mod classifier;
pub mod forest;
pub mod knn;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scaler;
pub mod synthetic;
pub mod tree;
pub mod voting;

pub use classifier::{Classifier, Dataset};
pub use forest::RandomForest;
pub use knn::KNeighbors;
pub use loader::{LoadedModel, ModelLoader};
pub use scaler::StandardScaler;
pub use tree::DecisionTree;
pub use voting::{Voting, VotingClassifier};
