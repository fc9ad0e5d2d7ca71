mod device_tests;
mod elevate_tests;
mod feature_tests;
