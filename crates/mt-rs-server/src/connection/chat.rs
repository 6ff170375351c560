use super::*;

impl ConnectionHandler {
    pub(super) fn handle_chat_message(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let chat = match ChatMessage::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad CHAT_MESSAGE from {handle}: {e}");
                return;
            }
        };
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };

        let can_shout = self
            .env
            .lock()
            .world
            .player(&name)
            .is_some_and(|p| p.has_priv("shout"));
        if !can_shout {
            self.send_chat(addr, "You don't have permission to shout.");
            return;
        }
        if chat.message.contains('\n') || chat.message.contains('\r') {
            self.send_chat(addr, "Newlines are not permitted in chat messages");
            return;
        }
        if self
            .hooks
            .lock()
            .on_chat_message(&name, &chat.message)
            .is_cancelled()
        {
            return;
        }

        info!("CHAT: <{name}> {}", chat.message);
        self.broadcast_chat(&format!("<{name}> {}", chat.message));
    }
}
