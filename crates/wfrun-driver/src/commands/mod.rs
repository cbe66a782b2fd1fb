pub mod exec;
pub mod generate;
mod run_args;

pub use exec::ExecArgs;
pub use generate::GenerateArgs;
