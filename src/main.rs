use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    neuralterm::cli::main()
}
