use fixture::*;


mod compositing;
mod floating;
mod layout;
mod managing;
