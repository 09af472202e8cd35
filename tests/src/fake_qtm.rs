use anyhow::{Context, bail};
use qualisys_common::network::ConnectionUrl;
use qualisys_core::network::MessageChannel;
use qualisys_protocols::data::DataPacketBuilder;
use qualisys_protocols::{Event, Message, PacketType};
use tokio::net::{TcpListener, TcpStream};

pub const IDENTITY: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// A QTM RT server that plays back whatever the test scripts.
pub struct FakeQtm {
    listener: TcpListener,
}

impl FakeQtm {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    pub fn url(&self) -> anyhow::Result<ConnectionUrl> {
        let port = self.listener.local_addr()?.port();
        Ok(ConnectionUrl::new("127.0.0.1", port))
    }

    /// Accepts the next client and greets it with the banner.
    pub async fn accept(&self) -> anyhow::Result<QtmSession> {
        let (socket, _) = self.listener.accept().await?;
        let mut session = QtmSession {
            channel: MessageChannel::new(socket),
        };
        session.reply("QTM RT Interface connected").await?;
        Ok(session)
    }
}

pub struct QtmSession {
    channel: MessageChannel<TcpStream>,
}

impl QtmSession {
    /// Waits for the next command and checks its text.
    pub async fn expect_command(&mut self, expected: &str) -> anyhow::Result<()> {
        let message = self.channel.receive().await.context("waiting for command")?;
        if !message.is_command() || message.text() != expected {
            bail!("expected command '{expected}', got '{}'", message.text());
        }
        Ok(())
    }

    /// Answers the version negotiation.
    pub async fn accept_version(&mut self) -> anyhow::Result<()> {
        self.expect_command("Version 1.23").await?;
        self.reply("Version set to 1.23").await
    }

    pub async fn reply(&mut self, text: &str) -> anyhow::Result<()> {
        let body = format!("{text}\0").into_bytes();
        Ok(self.channel.send(&Message::new(PacketType::Command, body)).await?)
    }

    pub async fn reply_error(&mut self, text: &str) -> anyhow::Result<()> {
        let body = format!("{text}\0").into_bytes();
        Ok(self.channel.send(&Message::new(PacketType::Error, body)).await?)
    }

    /// Answers `GetParameters 6d` with the given rigid body names.
    pub async fn serve_bodies(&mut self, names: &[&str]) -> anyhow::Result<()> {
        self.expect_command("GetParameters 6d").await?;
        let xml = parameters_xml(names);
        Ok(self
            .channel
            .send(&Message::new(PacketType::Xml, xml.into_bytes()))
            .await?)
    }

    pub async fn send_frame(
        &mut self,
        frame_number: u32,
        bodies: &[([f32; 3], [f32; 9])],
    ) -> anyhow::Result<()> {
        let body = DataPacketBuilder::new(u64::from(frame_number) * 10_000, frame_number)
            .six_d(bodies)
            .build();
        Ok(self.channel.send(&Message::new(PacketType::Data, body)).await?)
    }

    pub async fn send_event(&mut self, event: Event) -> anyhow::Result<()> {
        let message = Message::new(PacketType::Event, vec![event.as_u8()]);
        Ok(self.channel.send(&message).await?)
    }

    /// Fails if the client sends anything before hanging up.
    pub async fn expect_close(&mut self) -> anyhow::Result<()> {
        match self.channel.receive().await {
            Ok(message) => bail!("expected the client to hang up, got '{}'", message.text()),
            Err(_) => Ok(()),
        }
    }

    /// Waits until the client hangs up, discarding anything it still sends.
    pub async fn wait_for_close(&mut self) {
        while self.channel.receive().await.is_ok() {}
    }
}

pub fn parameters_xml(names: &[&str]) -> String {
    let bodies: String = names
        .iter()
        .map(|name| format!("<Body><Name>{name}</Name><Color R=\"0\" G=\"0\" B=\"255\"/></Body>"))
        .collect();
    format!(
        "<QTM_Parameters_Ver_1.23><The_6D><Bodies>{}</Bodies>{bodies}</The_6D></QTM_Parameters_Ver_1.23>\0",
        names.len()
    )
}
