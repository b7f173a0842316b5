fn main() {
    // Host builds (tests, simulator) don't link against ESP-IDF.
    #[cfg(feature = "esp-idf")]
    embuild::espidf::sysenv::output();
}
