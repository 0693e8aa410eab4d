mod channel;
mod discovery;
mod layout;
mod platform;
mod version;

pub use channel::Channel;
pub use discovery::{discover_installations, ChannelPath, ChannelTable, Installation};
pub use layout::InstallationLayout;
pub use platform::Platform;
pub use version::{read_last_version, BrowserVersion};
