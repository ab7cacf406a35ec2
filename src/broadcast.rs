//! 방 단위 메시지 팬아웃
//!
//! 연결마다 무제한 큐 하나를 두므로 같은 수신자에게 보낸 메시지는
//! 보낸 순서대로 도착한다.

use crate::protocol::ServerMessage;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Default)]
pub struct Broadcaster {
    /// 연결 송신 큐 (peer_id -> sender)
    peers: DashMap<String, UnboundedSender<ServerMessage>>,
    /// 방 구독자 (room_id -> peer_ids)
    rooms: DashMap<String, Vec<String>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, peer_id: &str, sender: UnboundedSender<ServerMessage>) {
        self.peers.insert(peer_id.to_string(), sender);
    }

    pub fn unregister(&self, peer_id: &str) {
        self.peers.remove(peer_id);
    }

    pub fn subscribe(&self, room_id: &str, peer_id: &str) {
        let mut members = self.rooms.entry(room_id.to_string()).or_default();
        if !members.iter().any(|id| id == peer_id) {
            members.push(peer_id.to_string());
        }
    }

    pub fn unsubscribe(&self, room_id: &str, peer_id: &str) {
        if let Some(mut members) = self.rooms.get_mut(room_id) {
            members.retain(|id| id != peer_id);
        }
        self.rooms.remove_if(room_id, |_, members| members.is_empty());
    }

    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    /// 특정 피어에게 메시지 전송
    pub fn send_to(&self, peer_id: &str, message: ServerMessage) {
        if let Some(sender) = self.peers.get(peer_id) {
            if sender.send(message).is_err() {
                tracing::debug!(peer_id = %peer_id, "Dropped message for closed connection");
            }
        }
    }

    /// 방의 특정 피어를 제외하고 브로드캐스트
    pub fn send_to_room_except(&self, room_id: &str, except_peer_id: &str, message: ServerMessage) {
        self.fan_out(room_id, Some(except_peer_id), message);
    }

    /// 방 전체에 브로드캐스트
    pub fn send_to_room(&self, room_id: &str, message: ServerMessage) {
        self.fan_out(room_id, None, message);
    }

    fn fan_out(&self, room_id: &str, except: Option<&str>, message: ServerMessage) {
        let Some(members) = self.rooms.get(room_id) else {
            return;
        };
        for peer_id in members.iter().filter(|id| Some(id.as_str()) != except) {
            if let Some(sender) = self.peers.get(peer_id) {
                let _ = sender.send(message.clone());
            }
        }
    }
}
