mod detection_tests;
mod secret_tests;
