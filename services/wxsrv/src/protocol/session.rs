//! Protocol session
//!
//! State of one poll cycle: the enabled calls in send order, the index of the
//! call whose response is awaited, and the raw fields collected so far, keyed
//! by the channel of the call that produced them. A session never touches the
//! socket; the scheduler feeds it frames and asks it what to send next.

use crate::error::ProtocolError;
use crate::protocol::catalog::CommandSpec;
use crate::protocol::codec::ResponseCodec;
use crate::protocol::frame::{self, FrameHeader};
use std::collections::BTreeMap;
use tracing::debug;
use wx_model::{Channel, RawFieldMap};

/// What a received frame did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Response accepted, more calls pending
    Continue,
    /// Response accepted, every call answered
    Complete,
    /// Header matches no pending call
    Unknown(FrameHeader),
    /// Header belongs to a pending call other than the awaited one
    Unexpected(&'static CommandSpec),
}

#[derive(Debug)]
pub struct Session {
    pending: Vec<&'static CommandSpec>,
    cursor: usize,
    accumulator: BTreeMap<Channel, RawFieldMap>,
}

impl Session {
    pub fn new(pending: Vec<&'static CommandSpec>) -> Self {
        Self {
            pending,
            cursor: 0,
            accumulator: BTreeMap::new(),
        }
    }

    /// Call whose request goes out next, `None` once all are answered
    pub fn next_request(&self) -> Option<&'static CommandSpec> {
        self.pending.get(self.cursor).copied()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.pending.len()
    }

    /// Stream codec for the connection this session runs on
    pub fn codec(&self) -> ResponseCodec {
        ResponseCodec::for_catalog()
    }

    /// Route one frame by its header and merge the decoded payload.
    ///
    /// Only the awaited call advances the cursor. Malformed frames are
    /// errors; the caller aborts the cycle on them.
    pub fn parse_response(&mut self, bytes: &[u8]) -> Result<ResponseOutcome, ProtocolError> {
        let header = frame::decode_header(bytes)?;

        let Some(position) = self.pending.iter().position(|c| c.response == header) else {
            return Ok(ResponseOutcome::Unknown(header));
        };
        let spec = self.pending[position];
        if position != self.cursor {
            return Ok(ResponseOutcome::Unexpected(spec));
        }

        let fields = frame::decode(bytes, &spec.layout)?;
        debug!(
            call = spec.name,
            command = header.command,
            subcommand = header.subcommand,
            fields = fields.len(),
            "Response decoded"
        );

        if let Some(channel) = spec.channel {
            self.accumulator.entry(channel).or_default().extend(fields);
        }
        self.cursor += 1;

        Ok(if self.is_complete() {
            ResponseOutcome::Complete
        } else {
            ResponseOutcome::Continue
        })
    }

    pub fn accumulator(&self) -> &BTreeMap<Channel, RawFieldMap> {
        &self.accumulator
    }

    /// Hand the collected fields to the flush step
    pub fn into_accumulator(self) -> BTreeMap<Channel, RawFieldMap> {
        self.accumulator
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::protocol::catalog::{FIRMWARE, GET_CURRENT, GET_DAILY_MIN, GET_MAX};
    use wx_model::RawValue;

    fn respond(spec: &CommandSpec, values: &[(&str, RawValue)]) -> Vec<u8> {
        let values: RawFieldMap = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        frame::encode(spec.response, &spec.layout, &values).unwrap()
    }

    #[test]
    fn test_three_calls_in_order() {
        let mut session = Session::new(vec![&FIRMWARE, &GET_CURRENT, &GET_MAX]);
        assert_eq!(session.next_request().map(|c| c.name), Some("Get Firmware"));

        let firmware = respond(&FIRMWARE, &[("softwaretype", "EasyWeatherV1.6.4".into())]);
        let outcome = session.parse_response(&firmware).unwrap();
        assert_eq!(outcome, ResponseOutcome::Continue);
        assert_eq!(session.next_request().map(|c| c.name), Some("Get Current Data"));

        let outcome = session
            .parse_response(&respond(&GET_CURRENT, &[("temp", RawValue::Integer(212))]))
            .unwrap();
        assert_eq!(outcome, ResponseOutcome::Continue);

        let outcome = session
            .parse_response(&respond(&GET_MAX, &[("temp", RawValue::Integer(305))]))
            .unwrap();
        assert_eq!(outcome, ResponseOutcome::Complete);
        assert!(session.is_complete());
        assert!(session.next_request().is_none());

        let acc = session.into_accumulator();
        assert_eq!(
            acc.keys().copied().collect::<Vec<_>>(),
            vec![Channel::Info, Channel::Current, Channel::Max]
        );
        assert_eq!(
            acc[&Channel::Info]["softwaretype"],
            RawValue::Text("EasyWeatherV1.6.4".into())
        );
        assert_eq!(acc[&Channel::Current]["temp"], RawValue::Integer(212));
        assert_eq!(acc[&Channel::Max]["temp"], RawValue::Integer(305));
    }

    #[test]
    fn test_unknown_frame_does_not_advance() {
        let mut session = Session::new(vec![&FIRMWARE, &GET_CURRENT]);
        session.parse_response(&respond(&FIRMWARE, &[])).unwrap();

        // Daily minimum was never requested
        let outcome = session.parse_response(&respond(&GET_DAILY_MIN, &[])).unwrap();
        assert_eq!(outcome, ResponseOutcome::Unknown(FrameHeader::new(11, 8)));
        assert_eq!(session.cursor(), 1);

        let outcome = session.parse_response(&respond(&GET_CURRENT, &[])).unwrap();
        assert_eq!(outcome, ResponseOutcome::Complete);
    }

    #[test]
    fn test_repeated_response_is_unexpected() {
        let mut session = Session::new(vec![&FIRMWARE, &GET_CURRENT]);
        let firmware = respond(&FIRMWARE, &[]);
        session.parse_response(&firmware).unwrap();

        let outcome = session.parse_response(&firmware).unwrap();
        assert!(matches!(
            outcome,
            ResponseOutcome::Unexpected(spec) if spec.name == "Get Firmware"
        ));
        assert_eq!(session.cursor(), 1);
        assert!(!session.is_complete());
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let mut session = Session::new(vec![&GET_CURRENT]);
        let frame = respond(&GET_CURRENT, &[]);
        assert!(matches!(
            session.parse_response(&frame[..20]),
            Err(ProtocolError::FrameTruncated { .. })
        ));
        assert!(matches!(
            session.parse_response(&frame[..2]),
            Err(ProtocolError::FrameTooShort { len: 2 })
        ));
        assert_eq!(session.cursor(), 0);
        assert!(session.accumulator().is_empty());
    }

    #[test]
    fn test_empty_session_is_complete() {
        let session = Session::new(Vec::new());
        assert!(session.is_complete());
        assert!(session.next_request().is_none());
    }
}
