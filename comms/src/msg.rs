use std::{borrow::Cow, io};

use crate::{Deserialize, Serialize};

type Header = u64;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_H: Header = 0;
const CONTROL_H: Header = 1;
const F64_H: Header = 2;
const I64_H: Header = 3;

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    F64(&'a [f64]),
    I64(&'a [i64]),
}

impl Payload<'_> {
    /// The amount of elements carried, regardless of their type.
    pub fn len(&self) -> usize {
        match self {
            Payload::F64(nums) => nums.len(),
            Payload::I64(nums) => nums.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::F64(_) => "f64",
            Payload::I64(_) => "i64",
        }
    }
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Join { worker_id: usize },
    Welcome { worker_count: usize },
    Barrier,
    Release,
    Ack,
    Disconnect,
}

/// The application layer message exchanged between group members.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// A short name for the message kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(_) => "control",
            Msg::Data(Payload::F64(_)) => "data/f64",
            Msg::Data(Payload::I64(_)) => "data/i64",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_header<T>(header: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid header {header}"),
        ))
    }

    fn misaligned<T>(err: bytemuck::PodCastError) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received a numeric payload that can't be viewed in place: {err:?}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR_H.to_be_bytes());
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL_H.to_be_bytes());

                // SAFETY: Serialize impl for `Command` is derived and not implemented
                //         by hand. Nor has a non string-key map inside.
                serde_json::to_writer(buf, &cmd).unwrap();
                None
            }
            Msg::Data(payload) => {
                let (header, bytes) = match payload {
                    Payload::F64(nums) => (F64_H, bytemuck::cast_slice(nums)),
                    Payload::I64(nums) => (I64_H, bytemuck::cast_slice(nums)),
                };

                buf.extend_from_slice(&header.to_be_bytes());
                Some(bytes)
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len());
        }

        let (header_buf, rest) = buf.split_at_mut(HEADER_SIZE);
        let mut header_bytes = [0; HEADER_SIZE];
        header_bytes.copy_from_slice(header_buf);
        let header = Header::from_be_bytes(header_bytes);
        let rest: &'a [u8] = rest;

        match header {
            ERR_H => {
                let string = std::str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            CONTROL_H => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            F64_H => match bytemuck::try_cast_slice(rest) {
                Ok(nums) => Ok(Self::Data(Payload::F64(nums))),
                Err(e) => Self::misaligned(e),
            },
            I64_H => match bytemuck::try_cast_slice(rest) {
                Ok(nums) => Ok(Self::Data(Payload::I64(nums))),
                Err(e) => Self::misaligned(e),
            },
            other => Self::invalid_header(other),
        }
    }
}
