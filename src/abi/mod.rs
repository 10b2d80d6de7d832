use alloy::sol;

// ERC-20 metadata accessors read for every audited token
sol! {
    interface IERC20Metadata {
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }
}

// OpenZeppelin Ownable surface
sol! {
    interface IOwnable {
        function owner() external view returns (address);
        function renounceOwnership() external;

        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
    }
}
