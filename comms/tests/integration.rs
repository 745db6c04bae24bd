use comms::{
    Deserialize, Element, Serialize,
    msg::{Command, Msg, Payload},
};
use tokio::io;

struct MyStr<'a>(&'a str);

impl<'a> Serialize<'a> for MyStr<'_> {
    fn serialize(&'a self, _buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        Some(self.0.as_bytes())
    }
}

impl<'a> Deserialize<'a> for MyStr<'a> {
    fn deserialize(buf: &'a mut [u8]) -> std::io::Result<Self> {
        Ok(Self(std::str::from_utf8(buf).unwrap()))
    }
}

#[test]
fn serialize_deserialize() {
    let s = MyStr("Hello, world!");
    let mut serialized = s.serialize(&mut Vec::new()).unwrap().to_vec();
    let deserialized = MyStr::deserialize(&mut serialized).unwrap();
    assert_eq!(deserialized.0, s.0);
}

#[tokio::test]
async fn send_recv() {
    const SIZE: usize = 128;

    let msg = MyStr("Hello, world!");

    let (one, two) = io::duplex(SIZE);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    tx.send(&msg).await.unwrap();

    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let mut buf: Vec<u8> = Vec::new();
    let s: MyStr = rx.recv_into(&mut buf).await.unwrap();

    assert_eq!(msg.0, s.0);
}

#[tokio::test]
async fn frames_keep_their_boundaries() {
    let (one, two) = io::duplex(64);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);
    let (rx, peer_tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, peer_tx);

    let block: Vec<f64> = (0..100).map(f64::from).collect();
    let sender = async move {
        tx.send(&Msg::Control(Command::Barrier)).await?;
        tx.send(&Msg::Data(f64::payload(&block))).await?;
        tx.send(&Msg::Data(Payload::I64(&[7, -7]))).await?;
        tx.send(&Msg::Control(Command::Disconnect)).await
    };

    let receiver = async move {
        let mut buf: Vec<u64> = Vec::new();

        let msg: Msg = rx.recv_into(&mut buf).await?;
        assert!(matches!(msg, Msg::Control(Command::Barrier)));

        let Msg::Data(payload) = rx.recv_into(&mut buf).await? else {
            panic!("expected data");
        };
        let got = f64::from_payload(payload).unwrap();
        assert_eq!(got.len(), 100);
        assert_eq!(got[99], 99.0);

        let Msg::Data(payload) = rx.recv_into(&mut buf).await? else {
            panic!("expected data");
        };
        assert!(f64::from_payload(payload).is_none());
        assert_eq!(i64::from_payload(payload).unwrap(), &[7, -7]);

        let msg: Msg = rx.recv_into(&mut buf).await?;
        assert!(matches!(msg, Msg::Control(Command::Disconnect)));
        Ok::<_, std::io::Error>(())
    };

    let (sent, received) = tokio::join!(sender, receiver);
    sent.unwrap();
    received.unwrap();
}

#[tokio::test]
async fn error_frames_carry_their_reason() {
    let (one, two) = io::duplex(64);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);
    let (rx, peer_tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, peer_tx);

    tx.send(&Msg::Err("worker 2 gave up".into())).await.unwrap();

    let mut buf: Vec<u64> = Vec::new();
    let Msg::Err(reason) = rx.recv_into(&mut buf).await.unwrap() else {
        panic!("expected an error frame");
    };
    assert_eq!(reason, "worker 2 gave up");
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    use tokio::io::AsyncWriteExt;

    let (mut raw, two) = io::duplex(64);
    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let len = (comms::MAX_FRAME_LEN as u64 + 1).to_be_bytes();
    raw.write_all(&len).await.unwrap();

    let mut buf: Vec<u64> = Vec::new();
    let err = rx.recv_into::<Msg, _>(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    assert!(buf.is_empty());
}

#[tokio::test]
async fn closing_mid_frame_is_an_eof() {
    use tokio::io::AsyncWriteExt;

    let (mut raw, two) = io::duplex(64);
    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    raw.write_all(&16u64.to_be_bytes()).await.unwrap();
    raw.write_all(&[0; 4]).await.unwrap();
    drop(raw);

    let mut buf: Vec<u64> = Vec::new();
    let err = rx.recv_into::<Msg, _>(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}
