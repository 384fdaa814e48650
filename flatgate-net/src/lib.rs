mod ipv4;
pub use self::ipv4::*;

mod ipv6;
pub use self::ipv6::*;

mod token;
pub use self::token::*;

mod fqdn;
pub use self::fqdn::*;
