/// Unit tests exercising the public library API
mod analytics_tests;
mod dispatch_tests;
mod store_tests;
