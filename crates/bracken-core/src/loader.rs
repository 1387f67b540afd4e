//! Loader pipeline.
//!
//! A loader is a byte-in/byte-out transform applied to file contents
//! before parsing. Loaders are registered per extension; several
//! loaders on one extension compose left to right. The `.js`/`.jsx`
//! path never runs the chain — loaders exist for foreign formats that
//! either reduce to JavaScript or only have side effects.

use thiserror::Error;

/// Error raised by a loader; propagated verbatim by the bundler.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LoaderError(pub String);

impl LoaderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A byte-stream transform.
///
/// A loader may return zero bytes: the bundler still creates a module
/// record, so the `require` site evaluates to an empty exports object.
pub trait Loader {
    fn load(&self, input: Vec<u8>) -> Result<Vec<u8>, LoaderError>;
}

/// Run a chain of loaders, each output feeding the next input.
pub fn run_chain(loaders: &[Box<dyn Loader>], input: Vec<u8>) -> Result<Vec<u8>, LoaderError> {
    let mut data = input;
    for loader in loaders {
        data = loader.load(data)?;
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;
    impl Loader for Upper {
        fn load(&self, input: Vec<u8>) -> Result<Vec<u8>, LoaderError> {
            Ok(input.to_ascii_uppercase())
        }
    }

    struct Exclaim;
    impl Loader for Exclaim {
        fn load(&self, mut input: Vec<u8>) -> Result<Vec<u8>, LoaderError> {
            input.push(b'!');
            Ok(input)
        }
    }

    #[test]
    fn chain_composes_left_to_right() {
        let loaders: Vec<Box<dyn Loader>> = vec![Box::new(Upper), Box::new(Exclaim)];
        let out = run_chain(&loaders, b"abc".to_vec()).unwrap();
        assert_eq!(out, b"ABC!");
    }

    #[test]
    fn empty_chain_is_identity() {
        let out = run_chain(&[], b"abc".to_vec()).unwrap();
        assert_eq!(out, b"abc");
    }
}
