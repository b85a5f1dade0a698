pub mod codec;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod frame;
pub mod header;
pub mod layout;
pub mod legacy;
pub mod matrix;
pub mod motion;
pub mod nmea;
pub mod pd0;
pub mod section;
pub mod validity;

pub use config::ScreenConfig;
pub use ensemble::Ensemble;
pub use error::DecodeError;
pub use frame::{EnsembleSplitter, RawEnsemble};
pub use header::{SectionHeader, ValueType};
pub use legacy::LegacyFrame;
pub use matrix::Matrix;
pub use motion::VelocityVector;
pub use nmea::NmeaRecord;
pub use section::{CoordinateFrame, Section, SectionBody};
