mod network_tests;
mod persistence_tests;
mod tensor_tests;
