fn main() {
    toxr::run(None)
}
