mod coordinator_tests;
mod importer_tests;
mod prompt_tests;
