//! Tool output captured from the reference disk images, shared by tests.

/// disktype on a FAT12 floppy with no volume label.
pub const FAT12_DISKTYPE: &str = "
--- practical.floppy.dd
Regular file, size 1.390 MiB (1457664 bytes)
FAT12 file system (hints score 5 of 5)
  Volume size 1.390 MiB (1457664 bytes, 2847 clusters of 512 bytes)
";

/// disktype on a single HFS volume with a label that needs sanitizing.
pub const HFS_DISKTYPE: &str = "
--- hfs-example.dd
Regular file, size 95.74 MiB (100392960 bytes)
HFS file system
  Volume name \"ok_images + rome2\"
  Volume size 95.74 MiB (100392960 bytes, 65360 blocks of 1536 bytes)
";

/// disktype on a hybrid ISO9660/HFS CD.
pub const ISO_HFS_DISKTYPE: &str = "
--- iso9660-hfs.iso
Regular file, size 880 KiB (901120 bytes)
HFS file system
  Volume name \"ISO9660/HFS\"
  Volume size 880 KiB (901120 bytes, 440 blocks of 2 KiB)
ISO9660 file system
  Volume name \"ISO9660/HFS\"
  Data size 880 KiB (901120 bytes, 440 blocks of 2 KiB)
";

/// fiwalk output for the FAT12 floppy: one directory, one allocated file,
/// one deleted file.
pub const FAT12_DFXML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dfxml xmlns="http://www.forensicswiki.org/wiki/Category:Digital_Forensics_XML" xmlns:dc="http://purl.org/dc/elements/1.1/" version="1.0">
  <metadata>
    <dc:type>Disk Image</dc:type>
  </metadata>
  <creator version="1.0">
    <program>fiwalk</program>
    <version>4.10.2</version>
    <library name="afflib" version="3.7.19"/>
    <execution_environment>
      <command_line>fiwalk -X dfxml.xml practical.floppy.dd</command_line>
    </execution_environment>
  </creator>
  <source>
    <image_filename>practical.floppy.dd</image_filename>
  </source>
  <volume offset="0">
    <partition_offset>0</partition_offset>
    <block_size>512</block_size>
    <ftype_str>fat12</ftype_str>
    <fileobject>
      <filename>Docs</filename>
      <partition>1</partition>
      <id>1</id>
      <name_type>d</name_type>
      <filesize>512</filesize>
      <alloc>1</alloc>
      <inode>6</inode>
      <meta_type>2</meta_type>
      <mtime>2008-09-11T09:38:40</mtime>
    </fileobject>
    <fileobject>
      <filename>ARP.EXE</filename>
      <partition>1</partition>
      <id>2</id>
      <name_type>r</name_type>
      <filesize>19536</filesize>
      <alloc>1</alloc>
      <used>1</used>
      <inode>5</inode>
      <meta_type>1</meta_type>
      <mode>511</mode>
      <nlink>1</nlink>
      <uid>0</uid>
      <gid>0</gid>
      <mtime>1999-04-23T22:22:00</mtime>
      <atime>2008-09-11T00:00:00</atime>
      <crtime>2008-09-11T09:39:12</crtime>
      <byte_runs>
        <byte_run file_offset="0" fs_offset="16896" img_offset="16896" len="19536"/>
      </byte_runs>
      <hashdigest type="md5">8d1b5ac5b6cd7d2c1b0a7e4b2b8c1a5f</hashdigest>
      <hashdigest type="sha1">5b0c4e5a1b0e5e0b4f1f1c6f8a4d2a8c9e8f7d6c</hashdigest>
    </fileobject>
    <fileobject>
      <filename>Docs/Private/ReyHalif.doc</filename>
      <partition>1</partition>
      <id>3</id>
      <name_type>r</name_type>
      <filesize>19968</filesize>
      <unalloc>1</unalloc>
      <alloc_inode>0</alloc_inode>
      <alloc_name>0</alloc_name>
      <inode>1029</inode>
      <meta_type>1</meta_type>
      <mtime>2002-05-16T08:55:28</mtime>
      <crtime>2008-09-11T09:39:54</crtime>
    </fileobject>
  </volume>
</dfxml>
"#;
