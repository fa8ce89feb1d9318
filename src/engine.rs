pub mod engine;
pub mod scenario;

#[cfg(test)]
mod tests;
