mod proptests;
mod upcoming;
mod utils;
