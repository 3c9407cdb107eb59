use std::env;
use std::fs;

use torrent_core::{Bitfield, PeerId, TorrentMetadata, Tracker, TrackerConfig};

fn main() {
    env_logger::init();

    let path = env::args().nth(1).expect("Torrent file required.");
    let data = fs::read(&path).expect("Failed to read torrent file");
    let torrent = TorrentMetadata::from_bytes(&data).expect("Failed to parse torrent file");

    println!("name:         {}", torrent.name().display());
    println!("info hash:    {}", torrent.info_hash());
    println!("announce:     {}", torrent.announce());
    for (i, tier) in torrent.announce_list().iter().enumerate() {
        println!("  tier {}:     {}", i, tier.join(", "));
    }
    if let Some(comment) = torrent.comment() {
        println!("comment:      {}", comment);
    }
    if let Some(created_by) = torrent.created_by() {
        println!("created by:   {}", created_by);
    }
    if let Some(created) = torrent.creation_time() {
        println!("created:      {}", created);
    }
    println!("private:      {}", torrent.is_private());
    println!(
        "pieces:       {} x {} bytes, last {} bytes",
        torrent.piece_count(),
        torrent.piece_length(),
        torrent.last_piece_length()
    );
    println!("total length: {}", torrent.total_length());
    for file in torrent.files() {
        println!("  {:>12}  {}", file.length, file.path.display());
    }

    let bitfield: Bitfield = torrent.new_bitfield();
    println!("bitfield:     {} bytes on the wire", bitfield.to_bytes().len());

    // Announce once if asked to.
    if env::args().nth(2).as_deref() == Some("--announce") {
        let tracker = Tracker::from_metadata(&torrent, PeerId::random(), TrackerConfig::default())
            .expect("Failed to create tracker");
        match tracker.announce() {
            Ok(peers) => {
                println!("{} peers, re-announce in {:?}", peers.len(), tracker.interval());
                for peer in peers {
                    println!("  {}", peer);
                }
            }
            Err(err) => println!("announce failed: {}", err),
        }
    }
}
