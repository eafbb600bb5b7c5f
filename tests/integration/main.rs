mod common;
mod feed_test;
mod session_test;
