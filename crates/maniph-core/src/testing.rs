//! Recording fake transport shared by resolver and ops tests.

use std::cell::RefCell;

use serde_json::Value;

use crate::conduit::{ConduitError, Transport};

pub(crate) struct FakeTransport {
    calls: RefCell<Vec<(String, Vec<(String, String)>)>>,
    responses: RefCell<Vec<Result<Value, ()>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            responses: RefCell::new(Vec::new()),
        }
    }

    /// Queue the next response, consumed in FIFO order.
    pub fn respond(&self, value: Value) {
        self.responses.borrow_mut().push(Ok(value));
    }

    /// Queue a remote rejection for the next call.
    pub fn fail_next(&self) {
        self.responses.borrow_mut().push(Err(()));
    }

    pub fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Transport for FakeTransport {
    fn call(&self, method: &str, params: &[(String, String)]) -> Result<Value, ConduitError> {
        self.calls
            .borrow_mut()
            .push((method.to_string(), params.to_vec()));
        let mut responses = self.responses.borrow_mut();
        if responses.is_empty() {
            panic!("unexpected Conduit call to {method}");
        }
        match responses.remove(0) {
            Ok(value) => Ok(value),
            Err(()) => Err(ConduitError::Remote {
                method: method.to_string(),
                code: "ERR-TEST".to_string(),
                info: "injected failure".to_string(),
            }),
        }
    }
}

pub(crate) fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}
