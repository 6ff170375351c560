//! Mod channel join, leave and relay.

use super::*;

use mt_rs_proto::packets::{ModChannelMsg, ModChannelName, ModChannelSignal, ModChannelSignalCode};

impl ConnectionHandler {
    fn send_channel_signal(&self, addr: SocketAddr, signal: ModChannelSignalCode, channel: String) {
        self.send(
            addr,
            id::toclient::MODCHANNEL_SIGNAL,
            &ModChannelSignal { signal, channel },
        );
    }

    pub(super) fn handle_modchannel_join(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let pkt = match ModChannelName::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad MODCHANNEL_JOIN from {handle}: {e}");
                return;
            }
        };
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };
        let joined =
            self.config.server.enable_mod_channels && self.channels.lock().join(&pkt.channel, handle);
        let signal = if joined {
            debug!("{name} joined mod channel {}", pkt.channel);
            ModChannelSignalCode::JoinOk
        } else {
            ModChannelSignalCode::JoinFailure
        };
        self.send_channel_signal(addr, signal, pkt.channel);
    }

    pub(super) fn handle_modchannel_leave(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let pkt = match ModChannelName::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad MODCHANNEL_LEAVE from {handle}: {e}");
                return;
            }
        };
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };
        let left = self.config.server.enable_mod_channels
            && self.channels.lock().leave(&pkt.channel, handle);
        let signal = if left {
            debug!("{name} left mod channel {}", pkt.channel);
            ModChannelSignalCode::LeaveOk
        } else {
            ModChannelSignalCode::LeaveFailure
        };
        self.send_channel_signal(addr, signal, pkt.channel);
    }

    pub(super) fn handle_modchannel_msg(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let mut msg = match ModChannelMsg::decode_from_client(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad MODCHANNEL_MSG from {handle}: {e}");
                return;
            }
        };
        if !self.config.server.enable_mod_channels {
            return;
        }
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };

        let recipients = {
            let channels = self.channels.lock();
            if !channels.is_registered(&msg.channel) {
                None
            } else {
                Some(channels.members(&msg.channel))
            }
        };
        let Some(recipients) = recipients else {
            debug!("{name} sent to unregistered mod channel {}", msg.channel);
            self.send_channel_signal(addr, ModChannelSignalCode::ChannelNotRegistered, msg.channel);
            return;
        };

        msg.sender = name.clone();
        let addrs: Vec<SocketAddr> = {
            let registry = self.registry.lock();
            recipients
                .into_iter()
                .filter(|h| *h != handle)
                .filter_map(|h| registry.get(h).map(|s| s.address))
                .collect()
        };
        for peer in addrs {
            self.send(peer, id::toclient::MODCHANNEL_MSG, &msg);
        }
        self.hooks
            .lock()
            .on_modchannel_message(&msg.channel, &name, &msg.message);
    }
}
