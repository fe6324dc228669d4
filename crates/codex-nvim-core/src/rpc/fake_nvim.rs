//! Loopback stand-in for a Neovim msgpack-rpc listener

use std::io::{BufReader, Write};
use std::net::TcpListener;
use std::thread;

use rmpv::Value as MsgValue;

use super::address::Transport;

/// Accept one connection and answer every request with `respond`
///
/// `respond` gets `(msgid, method, params)` and returns the messages to send
/// back, in order; an empty list leaves the request unanswered.
pub(crate) fn fake_nvim<F>(respond: F) -> (Transport, thread::JoinHandle<()>)
where
    F: Fn(MsgValue, &str, Vec<MsgValue>) -> Vec<MsgValue> + Send + 'static,
{
    fake_nvim_raw(move |msgid, method, params| {
        let mut bytes = Vec::new();
        for message in respond(msgid, method, params) {
            rmpv::encode::write_value(&mut bytes, &message).unwrap();
        }
        bytes
    })
}

/// Like `fake_nvim`, but `respond` returns the raw bytes to write
pub(crate) fn fake_nvim_raw<F>(respond: F) -> (Transport, thread::JoinHandle<()>)
where
    F: Fn(MsgValue, &str, Vec<MsgValue>) -> Vec<u8> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);

        while let Ok(MsgValue::Array(items)) = rmpv::decode::read_value(&mut reader) {
            let mut parts = items.into_iter().skip(1);
            let msgid = parts.next().unwrap_or(MsgValue::Nil);
            let method = parts.next().and_then(|m| m.as_str().map(str::to_string)).unwrap_or_default();
            let params = match parts.next() {
                Some(MsgValue::Array(params)) => params,
                _ => Vec::new(),
            };

            let bytes = respond(msgid, &method, params);
            if writer.write_all(&bytes).and_then(|_| writer.flush()).is_err() {
                break;
            }
        }
    });

    let transport = Transport::Tcp {
        host: "127.0.0.1".to_string(),
        port,
    };
    (transport, handle)
}

/// A msgpack-rpc response message
pub(crate) fn response(msgid: MsgValue, error: MsgValue, result: MsgValue) -> MsgValue {
    MsgValue::Array(vec![MsgValue::from(1), msgid, error, result])
}
