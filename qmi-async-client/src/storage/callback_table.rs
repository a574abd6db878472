/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::error::InvokeError;
use crate::{TransactionId, INVALID_TRANSACTION_ID};
use log::{error, trace, warn};
use parking_lot::Mutex;
use std::any::{self, Any};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

type Invoker<A> = Box<dyn FnOnce(A) + Send>;

/// A completion callback with its argument type erased
///
/// Created from a statically typed closure and only invocable with that same argument type,
/// see [CommandCallback::try_invoke]
pub struct CommandCallback {
    signature: &'static str,
    invoker: Box<dyn Any + Send>,
}

impl CommandCallback {
    pub fn new<A, F>(callback: F) -> Self
    where
        A: 'static,
        F: FnOnce(A) + Send + 'static,
    {
        let invoker: Invoker<A> = Box::new(callback);
        Self {
            signature: any::type_name::<A>(),
            invoker: Box::new(invoker),
        }
    }

    /// Name of the argument type this callback was created with
    pub fn signature(&self) -> &'static str {
        self.signature
    }

    /// Runs the callback if `A` matches the type it was created with
    ///
    /// A panic raised by the callback is caught and reported as [InvokeError::Panicked]
    pub fn try_invoke<A: 'static>(self, args: A) -> Result<(), InvokeError> {
        let Self { signature, invoker } = self;

        let invoker = invoker.downcast::<Invoker<A>>().map_err(|_| {
            InvokeError::SignatureMismatch {
                expected: signature,
                actual: any::type_name::<A>(),
            }
        })?;

        panic::catch_unwind(AssertUnwindSafe(move || (*invoker)(args)))
            .map_err(|payload| InvokeError::Panicked(panic_message(payload.as_ref())))
    }
}

impl std::fmt::Debug for CommandCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCallback")
            .field("signature", &self.signature)
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct CallbackSlots {
    next_id: TransactionId,
    entries: HashMap<TransactionId, CommandCallback>,
}

/// Owns the completion callbacks of outstanding requests, keyed by [TransactionId]
pub struct CallbackTable {
    slots: Mutex<CallbackSlots>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(CallbackSlots {
                next_id: INVALID_TRANSACTION_ID.wrapping_add(1),
                entries: HashMap::new(),
            }),
        }
    }

    /// Stores `callback` and returns the id under which it can later be taken back out
    ///
    /// Never returns [INVALID_TRANSACTION_ID]. Ids still outstanding after a wrap-around are
    /// skipped.
    pub fn add_callback(&self, callback: CommandCallback) -> TransactionId {
        let mut slots = self.slots.lock();

        let transaction_id = loop {
            let candidate = slots.next_id;
            slots.next_id = candidate.wrapping_add(1);
            if slots.next_id == INVALID_TRANSACTION_ID {
                slots.next_id = INVALID_TRANSACTION_ID.wrapping_add(1);
            }
            if candidate != INVALID_TRANSACTION_ID && !slots.entries.contains_key(&candidate) {
                break candidate;
            }
        };

        trace!(
            "add_callback: transaction_id: {transaction_id} signature: {}",
            callback.signature()
        );
        slots.entries.insert(transaction_id, callback);
        transaction_id
    }

    /// Type-erases `callback` and stores it, see [CallbackTable::add_callback]
    pub fn add_fn<A, F>(&self, callback: F) -> TransactionId
    where
        A: 'static,
        F: FnOnce(A) + Send + 'static,
    {
        self.add_callback(CommandCallback::new(callback))
    }

    /// Takes the callback stored under `transaction_id` out of the table
    ///
    /// At most one caller ever receives a given callback; every later lookup returns `None`.
    pub fn find_and_remove_callback(
        &self,
        transaction_id: TransactionId,
    ) -> Option<CommandCallback> {
        let removed = self.slots.lock().entries.remove(&transaction_id);
        if removed.is_none() {
            trace!("find_and_remove_callback: no callback for transaction_id: {transaction_id}");
        }
        removed
    }

    /// Invokes a callback obtained from [CallbackTable::find_and_remove_callback]
    ///
    /// Failures are logged and handed back, they never unwind into the caller.
    pub fn execute_callback<A: 'static>(
        callback: Option<CommandCallback>,
        args: A,
    ) -> Result<(), InvokeError> {
        let Some(callback) = callback else {
            warn!("execute_callback: callback is null, nothing to notify");
            return Err(InvokeError::Missing);
        };

        let res = callback.try_invoke(args);
        if let Err(ref err) = res {
            error!("execute_callback: {err}");
        }
        res
    }

    /// Evicts all outstanding callbacks without invoking them, returning how many there were
    pub fn clear(&self) -> usize {
        let evicted = std::mem::take(&mut self.slots.lock().entries);
        evicted.len()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CallbackTable {
    fn default() -> Self {
        Self::new()
    }
}
