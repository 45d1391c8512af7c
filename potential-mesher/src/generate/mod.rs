mod square_2d;

pub use square_2d::*;
