pub mod bitmap;
pub mod climate;
pub mod config;

pub use bitmap::{BitmapError, ChannelOrder, Color, Coordinate, GridIter, PixelGrid};
pub use climate::{
    ClimateError, ClimateModel, ModifierSet, ModifierValue, ParseError, SemanticError,
};
pub use config::{BitmapSettings, ClimateSettings, DuplicatePolicy, LoaderSettings, TextEncoding};
