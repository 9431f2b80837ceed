fn main() {
    harness::main();
}
