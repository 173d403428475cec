pub mod branches;
pub use self::branches::{branches, switch};

pub mod environments;
pub use self::environments::environments;

pub mod health;
pub use self::health::health;

pub mod root;
pub use self::root::root;
